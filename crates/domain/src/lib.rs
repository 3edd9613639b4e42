//! # hearth-domain
//!
//! Pure domain model for the hearth home automation controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions
//! - Define **channel identities** and the matcher used to resolve
//!   attach/detach events against discovered channels
//! - Define **actuator kinds** and output levels with range validation
//! - Define the closed set of **device events** (attached, detached, fault)
//! - Define **sensor readings** and the dewpoint augmentation rule
//! - Define the **state document** records exchanged with the persistence
//!   collaborator (`thermostats` / `actuators` / `sensors`)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod actuator;
pub mod channel;
pub mod document;
pub mod event;
pub mod sensor;
