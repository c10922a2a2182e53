//! Rich-text editing kernel over an arena backed element tree.
//!
//! The editable surface is a [`dom::Tree`]. [`editor::DocumentEditor`] moves boundary points
//! through it and applies typing, deletion, formatting and list changes the way a browser
//! `contenteditable` host would. [`markup`] reads and writes the tree as HTML with caret
//! markers, [`interop`] converts it to and from `tdoc` documents and [`render`] lays it out for
//! a terminal.

pub mod dom;
pub mod editor;
pub mod interop;
pub mod markup;
pub mod render;
pub mod theme;
