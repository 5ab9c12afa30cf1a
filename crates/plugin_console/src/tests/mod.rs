use super::*;
use std::{
    io::Write,
    time::{Duration, Instant},
};

mod support;
use support::*;

mod producer;
