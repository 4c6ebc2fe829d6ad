//! Unit and integration tests for the downloader module, grouped by submodule under test.

mod disk_space;
mod duplicates;
mod nzb;
mod queue;
