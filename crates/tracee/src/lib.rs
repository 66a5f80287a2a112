//! # tracee
//!
//! Entry points for the fixture binaries:
//!
//! - `forever`: allocate and free 1 MiB, print `step`, sleep one second, repeat
//! - `threaded`: 8 workers, each allocating and freeing 64 KiB 100 times
//! - `vectors`: 1024 zero-filled 1 MiB `Vec`s through the global allocator
//! - `realloc`: a block grown from 1 KiB to 512 KiB by reallocation, twice
//!
//! Run without arguments every binary does exactly the above. The flags in
//! [`cli`] only change sizes, counts and what happens on a fatal fault.

pub mod cli;
