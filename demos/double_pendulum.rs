use mechsim::*;

fn main() -> SimResult<()> {
    let mut engine = PendulumEngine::new(9.8, 0.0, std::f64::consts::PI / 8.0, 0.0)?;

    println!("{:>8} {:>12} {:>12} {:>12} {:>12}", "t", "theta1", "theta2", "total E", "pin force");
    for step in 0..=200 {
        if step % 20 == 0 {
            let (theta1, _, theta2, _) = engine.joint_state()?;
            let energy = engine.vars().get_value(DoublePendulum::TE)?;
            let pin: f64 = engine
                .reaction_forces()
                .iter()
                .take(2)
                .map(|r| r.magnitude * r.magnitude)
                .sum::<f64>()
                .sqrt();
            let time = engine.vars().time()?;
            println!("{time:8.3} {theta1:12.6} {theta2:12.6} {energy:12.6} {pin:12.6}");
        }
        engine.step(0.025)?;
    }
    Ok(())
}
