/*!
Small helpers shared by the insurance prediction crates.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod finite;
pub mod table;
