//! Buffer-size bounds (§3: "primary and secondary buffers (>= 4 MiB
//! each)", §5 resource bounds). `safecloud-framing` and `safecloud-session`
//! use ordinary blocking `Read`/`Write` rather than a hand-managed ring
//! buffer, so there is no literal 4 MiB allocation per connection here,
//! but the bound is still load-bearing as the ceiling every frame-length
//! check in the layers above must respect, and is asserted at compile time
//! below.

use safecloud_session::MAX_SESSION_FRAME_LEN;

/// The minimum buffer size the data model requires per connection.
pub const MIN_BUFFER_LEN: usize = 4 * 1024 * 1024;

const _: () = assert!(
    MAX_SESSION_FRAME_LEN <= MIN_BUFFER_LEN * 2,
    "a single session frame must fit within the primary+secondary buffer budget"
);
