use crate::site::{SiteList, SiteStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Suppressed {
    pub lost: usize,
    pub near: usize,
}

/// Drop every site whose last refinement failed, then collapse near pairs.
///
/// The adjacency scan marks the later site of a pair closer than
/// `sample_step` and skips past it, so a dense run loses every other site
/// instead of collapsing onto its first member.
pub(crate) fn suppress(sites: &mut SiteList, sample_step: f64) -> Suppressed {
    let lost = sites.retain(|s| s.is_ok());

    let min_sq = sample_step * sample_step;
    let mut cur = sites.cursor_front_mut();
    while let Some(here) = cur.current().map(|s| s.position()) {
        let near = cur
            .peek_next()
            .is_some_and(|n| n.position().sq_distance(here) < min_sq);
        cur.move_next();
        if near {
            if let Some(next) = cur.current_mut() {
                next.status = SiteStatus::SuppressNear;
            }
            cur.move_next();
        }
    }
    let near = sites.retain(|s| s.status != SiteStatus::SuppressNear);

    Suppressed { lost, near }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImagePoint;
    use crate::site::Site;

    fn list(rows: &[f64]) -> SiteList {
        rows.iter()
            .map(|&r| Site::new(ImagePoint::new(r, 10.0), 0.0))
            .collect()
    }

    fn rows(sites: &SiteList) -> Vec<f64> {
        sites.iter().map(|s| s.position().row).collect()
    }

    #[test]
    fn exactly_one_of_a_near_pair_survives() {
        let mut sites = list(&[0.0, 20.0, 24.0, 50.0]);
        let out = suppress(&mut sites, 10.0);
        assert_eq!(out, Suppressed { lost: 0, near: 1 });
        assert_eq!(rows(&sites), vec![0.0, 20.0, 50.0]);
    }

    #[test]
    fn dense_run_loses_every_other_site() {
        let mut sites = list(&[0.0, 3.0, 6.0, 9.0, 12.0]);
        let out = suppress(&mut sites, 10.0);
        assert_eq!(out.near, 2);
        assert_eq!(rows(&sites), vec![0.0, 6.0, 12.0]);
    }

    #[test]
    fn failed_sites_are_purged_first() {
        let mut sites = list(&[0.0, 5.0, 15.0, 30.0]);
        let mut cur = sites.cursor_front_mut();
        cur.move_next();
        if let Some(s) = cur.current_mut() {
            s.status = SiteStatus::SuppressLost;
        }
        cur.move_next();
        cur.move_next();
        if let Some(s) = cur.current_mut() {
            s.status = SiteStatus::SuppressContrast;
        }
        let out = suppress(&mut sites, 10.0);
        assert_eq!(out, Suppressed { lost: 2, near: 0 });
        assert_eq!(rows(&sites), vec![0.0, 15.0]);
    }
}
