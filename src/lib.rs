pub mod api;
pub mod args;
pub mod board;
pub mod client;
pub mod create;
pub mod detail;
pub mod geo;
pub mod kakao;
pub mod list;
pub mod login;
pub mod map;
pub mod request;
pub mod service;
pub mod session;
