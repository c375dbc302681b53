#![doc = "vf-dfcx-core: core logic library for vf-dfcx."]

//! This crate holds the Voiceflow project model, the local → Dialogflow CX
//! transformation and the synchronisation pipeline. It performs no I/O against the
//! remote agent itself: that goes through the [`contract::AgentClient`] trait, which the
//! CLI crate implements over HTTP.
//!
//! # Usage
//! Load a project with [`project::load_project`], then hand it to
//! [`synchronise::synchronise`] together with a client and a [`config::SyncConfig`].

pub mod config;
pub mod contract;
pub mod project;
pub mod remote;
pub mod synchronise;
pub mod tagging;
pub mod transform;
pub mod utterance;
