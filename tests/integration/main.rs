mod e2e_test;
mod pipeline_test;
mod scheduler_test;
mod support;
