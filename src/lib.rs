//! cloudshred: client-side encrypted cloud storage with cryptographic
//! deletion.
//!
//! Files are encrypted under per-file data encryption keys; each DEK is
//! wrapped by a puncturable key-wrapping scheme ([`pkw`]) so that deleting
//! a file means puncturing its tag — the wrapped key becomes unrecoverable
//! even from retained ciphertext. [`provider`] binds paths to tags,
//! [`cloud`] talks to the object store, and [`client`] orchestrates the
//! whole flow behind the CLI in [`app`].

pub mod app;
pub mod cli;
pub mod client;
pub mod cloud;
pub mod commands;
pub mod exit_codes;
pub mod output;
pub mod pkw;
pub mod provider;
