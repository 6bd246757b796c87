pub mod sweep_worker;
