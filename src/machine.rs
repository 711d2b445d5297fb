use crate::model::MachineType;

/// Fixed machine-number-to-line-type table for the plant floor.
pub const MACHINE_TABLE: &[(&str, MachineType)] = &[
    ("2", MachineType::Pot),
    ("11", MachineType::Pot),
    ("24", MachineType::Parfum),
    ("25", MachineType::Parfum),
    ("29", MachineType::Parfum),
    ("31", MachineType::Parfum),
    ("13", MachineType::Tube),
    ("14", MachineType::Tube),
    ("15", MachineType::Tube),
    ("16", MachineType::Tube),
    ("17", MachineType::Tube),
    ("18", MachineType::Tube),
    ("19", MachineType::Tube),
];

pub fn machine_type_for(machine_id: &str) -> Option<MachineType> {
    let id = machine_id.trim();
    MACHINE_TABLE
        .iter()
        .find(|(m, _)| *m == id)
        .map(|(_, t)| *t)
}
