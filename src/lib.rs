// Library root
// -----------
// This crate exposes the building blocks of the uploader. The binary
// (`main.rs`) wires them together and hands control to `ui`.
//
// Module responsibilities:
// - `catalog`, `view`, `classify`: list a directory, apply search,
//   filter, sort and pagination, and classify files by extension.
// - `selection`, `bookmarks`, `session`: explorer state and the commands
//   that change it.
// - `api`, `channels`: Telegram Bot API transport and destination
//   discovery.
// - `upload`: the sequential batch orchestrator and its history.
// - `config`, `error`, `probe`: settings file, shared error types and
//   optional video details.
// - `ui`: the terminal loop; the only module that talks to the operator.
//
// Everything below `ui` is usable without a terminal, which is what the
// tests rely on.
pub mod api;
pub mod bookmarks;
pub mod catalog;
pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod probe;
pub mod selection;
pub mod session;
pub mod ui;
pub mod upload;
pub mod view;
