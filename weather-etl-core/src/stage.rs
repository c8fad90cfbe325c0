pub mod fetch;
pub mod save;
pub mod transform;

pub use fetch::{OpenMeteoSource, WeatherSource};
pub use save::persist;
pub use transform::transform;

/// Identity of a task in the weather DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    FetchWeather,
    TransformWeather,
    SaveWeather,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::FetchWeather => "fetch_weather",
            TaskId::TransformWeather => "transform_weather",
            TaskId::SaveWeather => "save_weather",
        }
    }

    /// Tasks in execution order.
    pub const fn all() -> &'static [TaskId] {
        &[
            TaskId::FetchWeather,
            TaskId::TransformWeather,
            TaskId::SaveWeather,
        ]
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_are_listed_in_execution_order() {
        let names: Vec<&str> = TaskId::all().iter().map(TaskId::as_str).collect();
        assert_eq!(names, ["fetch_weather", "transform_weather", "save_weather"]);
    }

    #[test]
    fn display_matches_task_name() {
        assert_eq!(TaskId::SaveWeather.to_string(), "save_weather");
    }
}
