//! Hardware-backed tests. Each one is `#[ignore]`d and skips itself when no
//! device is configured.
