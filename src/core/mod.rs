//! Core, platform independent networking code.

pub mod arp;
pub mod check;
pub mod depacketizer;
pub mod link;
pub mod packetizer;
pub mod repr;
pub mod service;
pub mod storage;
pub mod stream;
pub mod time;
