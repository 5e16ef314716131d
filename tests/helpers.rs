#![allow(dead_code)]

//! Tiny helpers shared by tests that return results.

pub type Anyhow = anyhow::Result<()>;
