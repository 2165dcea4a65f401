#![allow(dead_code)]

pub mod datastore;
pub mod mailer;
pub mod summarizer;
