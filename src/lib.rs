pub mod flow_utils;
pub mod gui;
pub mod persistence;
