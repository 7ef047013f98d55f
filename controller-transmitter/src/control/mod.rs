pub mod command_loop;
pub mod control_loops;
pub mod flight_assist;
pub mod integrator;
pub mod pid;
pub mod state;
