use anyhow::Result;
use serde::Serialize;
use std::fmt::Display;

pub trait Renderer {
    fn render<T>(&self, view: &T) -> Result<()>
    where
        T: Serialize + Display;
}
