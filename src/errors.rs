//! Error Types
//!
//! This module defines the error types used throughout the scene graph.
//!
//! # Overview
//!
//! [`GraphError`] covers the recoverable failure surfaces of the graph:
//! - Asset lookup and loading failures
//! - Engine object creation failures
//! - Node adoption and hierarchy misuse
//!
//! Traversal and matrix math never fail, so nothing in the render pass
//! returns an error. Update-gate contention and skipped frames are reported
//! as plain `false` values rather than errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lantern::errors::{GraphError, Result};
//!
//! fn load(graph: &mut SceneGraph<HeadlessEngine>) -> Result<()> {
//!     let material = graph.make_material_from_file("Lit", "assets/lit.mat")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::scene::{NodeId, NodeKey};

/// The main error type for the scene graph.
#[derive(Error, Debug)]
pub enum GraphError {
    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// The requested asset does not exist.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// A file was expected but the path names a directory.
    #[error("Asset is a directory, a file was expected: {0}")]
    AssetIsDirectory(String),

    /// The asset exists but could not be read or is empty.
    #[error("Asset is empty or unreadable: {0}")]
    EmptyAsset(String),

    /// The asset container format is not supported by this build.
    #[error("Unsupported asset format: {0}")]
    UnsupportedAsset(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The rendering engine refused to create an object.
    #[error("Engine failed to create {0}")]
    EngineObject(&'static str),

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// The node (or the engine entity it wraps) is already owned by the arena.
    #[error("Node {0} is already owned by the scene graph")]
    AlreadyAdopted(NodeId),

    /// A node key did not resolve to a live node.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeKey),

    /// Children were requested on a node that cannot hold any.
    #[error("Node '{0}' is not a composite and cannot hold children")]
    NotComposite(String),

    /// Linking the two nodes would make the graph cyclic.
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// The would-be parent
        parent: NodeKey,
        /// The would-be child
        child: NodeKey,
    },

    /// The node has a different kind than the operation requires.
    #[error("Expected a {expected} node, found {found}")]
    WrongKind {
        /// Kind the operation needs
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;
