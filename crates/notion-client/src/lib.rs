//! Notion client
//!
//! Stores mirrored tasks as pages of one Notion database and implements
//! [`tns_core::record::RecordStore`].

mod client;
mod dto;
pub mod properties;

pub use client::{NotionClient, NotionConfig, NOTION_API_URL, NOTION_VERSION};
pub use dto::{DatabaseDto, PageDto, QueryResponse};
