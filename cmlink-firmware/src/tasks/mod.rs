//! Embassy async tasks
//!
//! Console side: link receive, retry sweep, heartbeat and buttons.
//! Machine-room side: link dispatch, watchdog and the actuator tasks.

pub mod controls;
pub mod heartbeat;
pub mod incline;
pub mod link_rx;
pub mod retry_sweep;
pub mod slave_link;
pub mod speed_sensor;
pub mod watchdog;
pub mod wax_pump;

pub use controls::{controls_task, Buttons};
pub use heartbeat::heartbeat_task;
pub use incline::{incline_task, InclineMotor};
pub use link_rx::link_rx_task;
pub use retry_sweep::retry_sweep_task;
pub use slave_link::slave_link_task;
pub use speed_sensor::{speed_sensor_task, DEFAULT_UM_PER_PULSE};
pub use watchdog::watchdog_task;
pub use wax_pump::wax_pump_task;
