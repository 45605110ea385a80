//! Reconciliation between the device store and the remote user store.

pub mod migration;
