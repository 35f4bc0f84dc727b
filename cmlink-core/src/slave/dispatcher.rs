//! Command dispatch
//!
//! Maps one parsed frame to one reply. Polls read the machine state and
//! never change it. Set and action commands are validated completely before
//! anything is applied, so a rejected command has no side effect.

use cmlink_protocol::{
    Command, FanId, Frame, FrameError, Incline, NakCode, RelayId, Response, Speed,
};

use crate::config::LinkConfig;
use crate::traits::{MachineRoom, VfdStatus};

/// Value limits enforced on set commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    pub max_speed: Speed,
    pub max_incline: Incline,
}

impl From<&LinkConfig> for Limits {
    fn from(config: &LinkConfig) -> Self {
        Self {
            max_speed: config.max_speed(),
            max_incline: config.max_incline(),
        }
    }
}

/// What the dispatcher did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Poll answered with a typed response
    Data,
    /// Command applied and acknowledged
    Applied(Command),
    /// Command rejected with a NAK
    Rejected(NakCode),
}

/// Reply to transmit, and what it means
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reply {
    pub frame: Frame,
    pub outcome: Outcome,
}

/// Execute the command in `frame` and build the reply
pub fn dispatch<M: MachineRoom>(
    frame: &Frame,
    machine: &mut M,
    limits: &Limits,
) -> Result<Reply, FrameError> {
    let seq = frame.seq;

    let command = match Command::from_frame(frame) {
        Ok(command) => command,
        Err(e) => return reject(seq, e.into()),
    };

    if let Some(response) = poll(&command, machine) {
        return Ok(Reply {
            frame: response.to_frame(seq)?,
            outcome: Outcome::Data,
        });
    }

    match apply(command, machine, limits) {
        Ok(()) => Ok(Reply {
            frame: Response::Ack { seq }.to_frame(seq)?,
            outcome: Outcome::Applied(command),
        }),
        Err(code) => reject(seq, code),
    }
}

fn reject(seq: u8, code: NakCode) -> Result<Reply, FrameError> {
    Ok(Reply {
        frame: Response::Nak { seq, code }.to_frame(seq)?,
        outcome: Outcome::Rejected(code),
    })
}

/// Answer a poll from the current machine state
fn poll<M: MachineRoom>(command: &Command, machine: &M) -> Option<Response> {
    let response = match command {
        Command::GetSensorSpeed => Response::SensorSpeed(machine.sensed_speed()),
        Command::GetStatus => Response::Status(machine.status_flags()),
        Command::GetInclinePosition => Response::InclinePosition(machine.incline_position()),
        Command::GetFanState => Response::FanState {
            head: machine.fan_level(FanId::Head),
            chest: machine.fan_level(FanId::Chest),
        },
        _ => return None,
    };
    Some(response)
}

/// Validate and apply a set or action command
fn apply<M: MachineRoom>(
    command: Command,
    machine: &mut M,
    limits: &Limits,
) -> Result<(), NakCode> {
    match command {
        Command::SetSpeed(speed) => {
            if machine.vfd_status() != VfdStatus::Ok {
                return Err(NakCode::VfdFault);
            }
            if speed > limits.max_speed {
                return Err(NakCode::InvalidPayload);
            }
            machine.set_speed(speed);
        }
        Command::SetIncline(incline) => {
            if incline > limits.max_incline {
                return Err(NakCode::InvalidPayload);
            }
            if !machine.incline_homed() {
                return Err(NakCode::NotReady);
            }
            machine.set_incline_target(incline);
        }
        Command::SetRelay {
            relay: RelayId::WaxPump,
            state,
        } => machine.set_wax_pump(state),
        Command::SetFan { fan, level } => machine.set_fan(fan, level),
        Command::CalibrateIncline => machine.start_homing(),
        Command::EmergencyStop => machine.enter_safe_state(),
        Command::GetSensorSpeed
        | Command::GetStatus
        | Command::GetInclinePosition
        | Command::GetFanState => return Err(NakCode::UnknownCommand),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slave::testing::FakeMachine;
    use cmlink_protocol::messages::{CMD_ACK, CMD_NAK, RSP_FAN_STATE, RSP_STATUS};
    use cmlink_protocol::{FanLevel, RelayState};

    fn limits() -> Limits {
        Limits::from(&LinkConfig::default())
    }

    fn run(machine: &mut FakeMachine, command: Command) -> Reply {
        let frame = command.to_frame(9).unwrap();
        dispatch(&frame, machine, &limits()).unwrap()
    }

    #[test]
    fn test_set_speed_applied() {
        let mut machine = FakeMachine::ready();
        let reply = run(&mut machine, Command::SetSpeed(Speed::from_centi_kmh(1200)));

        assert_eq!(reply.frame.cmd, CMD_ACK);
        assert_eq!(reply.frame.seq, 9);
        assert_eq!(reply.frame.payload.as_slice(), &[9]);
        assert_eq!(machine.speed_target, Speed::from_centi_kmh(1200));
    }

    #[test]
    fn test_set_speed_with_vfd_fault() {
        let mut machine = FakeMachine {
            vfd: VfdStatus::Fault,
            ..FakeMachine::ready()
        };
        let reply = run(&mut machine, Command::SetSpeed(Speed::from_centi_kmh(500)));

        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::VfdFault));
        assert_eq!(reply.frame.cmd, CMD_NAK);
        assert_eq!(reply.frame.payload.as_slice(), &[9, 0xE6]);
        assert_eq!(machine.speed_target, Speed::ZERO);
    }

    #[test]
    fn test_set_speed_over_limit() {
        let mut machine = FakeMachine::ready();
        let reply = run(&mut machine, Command::SetSpeed(Speed::from_centi_kmh(1951)));
        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::InvalidPayload));
        assert_eq!(machine.speed_target, Speed::ZERO);
    }

    #[test]
    fn test_incline_requires_homing() {
        let mut machine = FakeMachine {
            homed: false,
            ..FakeMachine::ready()
        };
        let reply = run(&mut machine, Command::SetIncline(Incline::from_deci_percent(50)));
        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::NotReady));

        let reply = run(&mut machine, Command::SetIncline(Incline::from_deci_percent(151)));
        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::InvalidPayload));
    }

    #[test]
    fn test_calibrate_clears_homed() {
        let mut machine = FakeMachine::ready();
        let reply = run(&mut machine, Command::CalibrateIncline);
        assert_eq!(reply.outcome, Outcome::Applied(Command::CalibrateIncline));
        assert!(!machine.homed);
        assert_eq!(machine.homing_started, 1);
    }

    #[test]
    fn test_unknown_opcode() {
        let mut machine = FakeMachine::ready();
        let frame = Frame::empty(4, 0x55);
        let reply = dispatch(&frame, &mut machine, &limits()).unwrap();
        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::UnknownCommand));
        assert_eq!(reply.frame.payload.as_slice(), &[4, 0xE2]);
    }

    #[test]
    fn test_bad_fan_id() {
        let mut machine = FakeMachine::ready();
        let frame = Frame::new(4, 0x14, &[0x07, 0x01]).unwrap();
        let reply = dispatch(&frame, &mut machine, &limits()).unwrap();
        assert_eq!(reply.outcome, Outcome::Rejected(NakCode::InvalidPayload));
    }

    #[test]
    fn test_fan_state_poll() {
        let mut machine = FakeMachine::ready();
        run(
            &mut machine,
            Command::SetFan {
                fan: FanId::Head,
                level: FanLevel::Full,
            },
        );

        let reply = run(&mut machine, Command::GetFanState);
        assert_eq!(reply.outcome, Outcome::Data);
        assert_eq!(reply.frame.cmd, RSP_FAN_STATE);
        assert_eq!(reply.frame.seq, 9);
        assert_eq!(reply.frame.payload.as_slice(), &[2, 0]);
    }

    #[test]
    fn test_status_reports_disconnected_drive() {
        let mut machine = FakeMachine {
            vfd: VfdStatus::Disconnected,
            ..FakeMachine::ready()
        };
        let reply = run(&mut machine, Command::GetStatus);
        assert_eq!(reply.frame.cmd, RSP_STATUS);
        assert_eq!(reply.frame.payload.as_slice(), &[0x01]);
    }

    #[test]
    fn test_wax_pump_and_emergency_stop() {
        let mut machine = FakeMachine::ready();
        run(
            &mut machine,
            Command::SetRelay {
                relay: RelayId::WaxPump,
                state: RelayState::On,
            },
        );
        assert_eq!(machine.wax_pump, Some(RelayState::On));

        let reply = run(&mut machine, Command::EmergencyStop);
        assert_eq!(reply.outcome, Outcome::Applied(Command::EmergencyStop));
        assert_eq!(machine.safe_state_entries, 1);
        assert_eq!(machine.wax_pump, Some(RelayState::Off));
    }
}
