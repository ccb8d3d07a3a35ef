pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod show;

#[cfg(test)]
pub(crate) mod test_support;
