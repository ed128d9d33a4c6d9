pub(crate) mod backend;
pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod measure;
pub(crate) mod pipeline;
pub(crate) mod surface_pool;
