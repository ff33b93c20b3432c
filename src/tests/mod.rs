
#[cfg(test)]
pub mod llm {
    pub mod manager;
    pub mod resilience;
    pub mod support;
    pub mod telemetry;
}
