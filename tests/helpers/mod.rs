//! Test helper utilities
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

pub mod db_utils;

#[allow(unused_imports)]
pub use db_utils::{
    assert_has_column, association_count, count_tracks_for, create_test_db, seed_artist,
    seed_association, seed_track, seed_user,
};
