//! Kilde answers questions over a mixed corpus of PDF documents and
//! time-aligned video transcripts, citing the pages and timestamps every
//! answer rests on. ("Kilde" is the Norwegian word for "source".)
//!
//! Source material flows through [`source`] readers into the [`chunking`]
//! module, which produces chunks whose identity is a pure function of
//! `(source_id, ordinal)`. The [`index`] pipeline embeds them via
//! [`embedding`] and writes them into a [`store`] that serves both lexical
//! and vector search. At query time, [`retrieval`] runs both searches
//! concurrently and fuses the ranked lists under a relevance threshold,
//! [`rag`] packs the survivors into a budgeted context and generates a cited
//! answer through [`generation`], and the [`orchestrator`] wires the two
//! pipelines together for the [`cli`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kilde::config::Settings;
//! use kilde::index::IndexMode;
//! use kilde::orchestrator::Orchestrator;
//! use kilde::rag::QueryOutcome;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.build_index(IndexMode::Incremental).await?;
//!     println!("Indexed {} chunks", report.total_indexed());
//!
//!     match orchestrator.answer_question("What color is the sky?").await? {
//!         QueryOutcome::Answered(answer) => println!("{}", answer.text),
//!         QueryOutcome::NoRelevantResults { message } => println!("{}", message),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod source;
pub mod store;

pub use error::{KildeError, Result};
