//! GitHub REST implementation of the social graph port.

mod client;
mod dto;

pub use client::GithubClient;
pub use dto::UserDto;
