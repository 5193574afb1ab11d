//! Headless chart service for statistical queries.
//!
//! A query like "counties with the highest unemployment in California"
//! goes to the natural language API, which answers with a place and a
//! page layout of chart tiles. Every tile is fetched and drawn here,
//! concurrently, into self-contained SVG documents that need no fonts,
//! scripts, or stylesheets from the embedding page. One broken tile is
//! dropped from the answer; it never fails the whole query.
//!
//! The pipeline, in module order: [`server`] accepts the query and fans
//! out, [`dc`] talks to the data APIs, [`page`] walks the layout into
//! tile jobs, [`tiles`] fetches and draws each chart, with [`scale`],
//! [`text`], [`format`], and [`render`] doing the axis, measuring, and
//! markup work underneath.

pub mod config;
pub mod dc;
pub mod format;
pub mod page;
pub mod render;
pub mod scale;
pub mod server;
pub mod text;
pub mod theme;
pub mod tiles;
