//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities, providing a clean API for data access.

pub mod operateur;

pub use operateur::{
    NewOperateur, OperateurDraft, OperateurFilter, OperateurRepository, UpdateOperateur,
};
