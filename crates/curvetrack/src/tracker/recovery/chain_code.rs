//! 8-connected chain-code tracing on a binary edge window.

use image::GrayImage;

/// Freeman directions as `(d_row, d_col)`, clockwise from east (rows grow downwards).
const DIR: [(i64, i64); 8] = [
    (0, 1),   // 0: E
    (1, 1),   // 1: SE
    (1, 0),   // 2: S
    (1, -1),  // 3: SW
    (0, -1),  // 4: W
    (-1, -1), // 5: NW
    (-1, 0),  // 6: N
    (-1, 1),  // 7: NE
];

/// Probe order relative to the current heading: right turn first, back last.
const PROBE: [usize; 8] = [2, 1, 0, 7, 6, 5, 4, 3];

/// Result of one trace, in window pixel coordinates `[row, col]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainTrace {
    pub points: Vec<[u32; 2]>,
    /// The trace came back to its seed heading the same way it left.
    pub closed: bool,
}

/// Heading at a seed, chosen from the window border it touches.
pub(crate) fn initial_direction(seed: [u32; 2], rows: u32, cols: u32) -> usize {
    let [r, c] = seed;
    if r == 0 {
        4
    } else if r + 1 == rows {
        0
    } else if c == 0 {
        2
    } else if c + 1 == cols {
        6
    } else {
        0
    }
}

fn is_edge(map: &GrayImage, r: i64, c: i64) -> bool {
    let (w, h) = map.dimensions();
    r >= 0 && c >= 0 && r < h as i64 && c < w as i64 && map.get_pixel(c as u32, r as u32)[0] > 0
}

/// Follow edge pixels from `seed`.
///
/// At every step the neighbours are probed in [`PROBE`] order relative to
/// the current heading and the first edge pixel is taken. The trace ends
/// open when no neighbour qualifies, and closed when it is back on the seed
/// about to leave in its first direction. The length is capped at
/// `8 · (width + height)` steps; a capped trace is open.
pub fn trace_chain(map: &GrayImage, seed: [u32; 2]) -> ChainTrace {
    let (cols, rows) = map.dimensions();
    let mut trace = ChainTrace {
        points: vec![seed],
        closed: false,
    };
    if !is_edge(map, seed[0] as i64, seed[1] as i64) {
        return trace;
    }

    let max_steps = 8 * (cols as usize + rows as usize);
    let (mut r, mut c) = (seed[0] as i64, seed[1] as i64);
    let mut heading = initial_direction(seed, rows, cols);
    let mut first_move = None;

    for _ in 0..max_steps {
        let next = PROBE
            .iter()
            .map(|off| (heading + off) % 8)
            .find(|&d| is_edge(map, r + DIR[d].0, c + DIR[d].1));
        let Some(d) = next else {
            return trace;
        };
        let at_seed = r == seed[0] as i64 && c == seed[1] as i64;
        match first_move {
            None => first_move = Some(d),
            Some(first) if at_seed && d == first => {
                trace.closed = true;
                return trace;
            }
            Some(_) => {}
        }
        r += DIR[d].0;
        c += DIR[d].1;
        heading = d;
        trace.points.push([r as u32, c as u32]);
    }
    tracing::trace!(steps = max_steps, "chain-code trace hit its step cap");
    trace
}
