//! # Engine Module
//!
//! The stateful layer of rifdock: a multi-resolution beam search over a
//! hierarchical index space, plus the tasks that post-process its results.
//!
//! ## Overview
//!
//! A search seeds every coarse nest cell of every scaffold, scores the
//! samples in parallel through caller-supplied collaborators, keeps a beam of
//! the best, and expands the survivors into finer cells until the last
//! resolution. The engine knows nothing about poses or energies; those come
//! in through the traits in [`interfaces`].
//!
//! ## Architecture
//!
//! - **Contracts** ([`interfaces`]) - `Scene`, `Director`, `Objective` and the scaffold traits
//! - **Configuration** ([`config`]) - Search and task parameters with validation
//! - **Context** ([`context`]) - Collaborators and counters of one run
//! - **Workers** ([`scene_pool`]) - Thread pool with one scene per worker
//! - **Stages** ([`stage`], [`beam`]) - Parallel scoring, beam selection and expansion
//! - **Driver** ([`hsearch`], [`state`]) - The search state machine and its outcome
//! - **Scaffolds** ([`scaffold`]) - A fixed scaffold list for simple runs
//! - **Tasks** ([`tasks`]) - Filtering and refinement of result lists
//! - **Progress Monitoring** ([`progress`]) - Callback events for front ends
//! - **Error Handling** ([`error`]) - Engine and scoring error types

pub mod beam;
pub mod config;
pub mod context;
pub mod error;
pub mod hsearch;
pub mod interfaces;
pub mod progress;
pub mod scaffold;
pub mod scene_pool;
pub mod stage;
pub mod state;
pub mod tasks;
