pub(crate) mod bbox;
pub(crate) mod length;
pub(crate) mod viewbox;
