// Domain layer - Core types shared by the rendering engine and the job pipeline

pub mod model;
