pub mod cluster;
pub mod desired;
pub mod machine;
pub mod reference;
pub mod status;
