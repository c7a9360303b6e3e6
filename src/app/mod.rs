// Application layer: the concrete stage runners wired into the scenario pipeline.

pub mod stages;
