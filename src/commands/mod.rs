/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `export`: list the session index and optionally download every conversation

Handlers are thin: they build the library components from configuration and
present progress on the console.
*/

pub mod export;

pub use export::run_export;
