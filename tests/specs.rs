//! Black-box behavioral specifications: spawn the real `mush` binary
//! against a mocked queue server and observe its HTTP traffic and exit
//! behavior end to end.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/bash_happy_path.rs"]
mod bash_happy_path;

#[path = "specs/startup_failure.rs"]
mod startup_failure;
