//! Files written from harvested records.
//!
//! # Submodules
//!
//! - [`markdown`]: one Markdown document per fetched article
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── articles/
//! │   └── order-flow-auctions.md   # front matter + body
//! └── papers/
//!     └── flash-boys-20.pdf        # --download-pdfs
//! ```

pub mod markdown;
