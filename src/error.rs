use thiserror::Error;

/// Everything that can stop a frame before the first pixel is written.
///
/// The per-pixel paths never produce these; they are raised once, at the
/// configuration boundary or by [`Level::validate`](crate::world::Level::validate).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid render configuration: {0}")]
    Config(String),

    #[error("node {node}: partition line has zero length")]
    DegeneratePartition { node: usize },

    #[error("node {node}: child {child:#06x} points outside the tree")]
    BadChild { node: usize, child: u16 },

    #[error("subsector {subsector}: seg range runs past the seg list")]
    BadSegRange { subsector: usize },

    #[error("{what} {index} references missing sector {sector}")]
    MissingSector {
        what: &'static str,
        index: usize,
        sector: usize,
    },

    #[error("{what} {index} references missing {target} {id}")]
    BadReference {
        what: &'static str,
        index: usize,
        target: &'static str,
        id: usize,
    },

    #[error("framebuffer is {got_w}x{got_h}, renderer configured for {want_w}x{want_h}")]
    FrameSize {
        want_w: usize,
        want_h: usize,
        got_w: usize,
        got_h: usize,
    },
}
