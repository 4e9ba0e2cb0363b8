use state_machines::state_machine;

state_machine! {
    name: QueryMachine,
    state: QueryState,
    initial: Admitted,
    states: [Admitted, SafetyChecked, Blocked, Retrieved, Generated, Logged, Responded, Failed],
    events {
        check_safety { transition: { from: Admitted, to: SafetyChecked } }
        block { transition: { from: SafetyChecked, to: Blocked } }
        retrieve { transition: { from: SafetyChecked, to: Retrieved } }
        generate { transition: { from: Retrieved, to: Generated } }
        log_incident { transition: { from: Blocked, to: Logged } }
        log { transition: { from: Generated, to: Logged } }
        respond { transition: { from: Logged, to: Responded } }
        abort {
            transition: { from: Admitted, to: Failed }
            transition: { from: SafetyChecked, to: Failed }
            transition: { from: Blocked, to: Failed }
            transition: { from: Retrieved, to: Failed }
            transition: { from: Generated, to: Failed }
            transition: { from: Logged, to: Failed }
        }
    }
}

pub fn admitted() -> QueryMachine<(), Admitted> {
    QueryMachine::new(())
}
