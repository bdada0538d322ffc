use log::info;
use vessel_guidance::*;

const TIME_STEP: f64 = 0.05;
const MAX_TICKS: usize = 50_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => GuidanceConfig::load(path)?,
        None => GuidanceConfig::default(),
    };

    run_maneuver(&config)?;
    run_landing(&config)?;
    run_hover(&config)?;

    Ok(())
}

fn run_maneuver(config: &GuidanceConfig) -> GuidanceResult<()> {
    info!("--- Maneuver ---");
    let mut vessel = SimulatedVessel::in_space(vec![
        SimStage::new(1_500.0, 800.0, 40_000.0, 280.0),
        SimStage::new(3_000.0, 1_200.0, 20_000.0, 320.0),
    ])
    .with_payload(2_000.0)
    .with_velocity(Vector3D::new(0.0, 2_200.0, 0.0));

    let node = vessel.add_node(600.0, 350.0, 0.0, 0.0)?;
    let mut executor = ManeuverExecutor::new(&mut vessel, node, config.maneuver.clone())?;
    let mut runner = ProgramRunner::new(MAX_TICKS).with_auto_staging(&vessel)?;
    let outcome = runner.run(&mut executor, &mut vessel, |v| v.advance(TIME_STEP))?;

    info!("{:?}, mode {:?}", outcome, executor.mode());
    runner.recorder().log_summary();
    Ok(())
}

fn run_landing(config: &GuidanceConfig) -> GuidanceResult<()> {
    info!("--- Suicide burn ---");
    let mun = CelestialBody::with_surface_gravity("Mun".to_string(), 200_000.0, 1.63);
    let mut vessel = SimulatedVessel::flying(1.63, 6_000.0, vec![SimStage::new(1_200.0, 1_800.0, 12_000.0, 310.0)])
        .with_body(mun)
        .with_velocity(Vector3D::new(-60.0, 40.0, 15.0))
        .with_terrain(|lat, lon| 400.0 + 300.0 * (lat * 40.0).sin() * (lon * 25.0).cos());

    let mut descent = DescentController::new(&mut vessel, config.descent.clone())?;
    let mut runner = ProgramRunner::new(MAX_TICKS);
    let outcome = runner.run(&mut descent, &mut vessel, |v| v.advance(TIME_STEP))?;
    info!("Descent {:?}", outcome);

    let mut touchdown = descent.hand_off(&mut vessel, config.touchdown.clone())?;
    let outcome = runner.run(&mut touchdown, &mut vessel, |v| v.advance(TIME_STEP))?;
    info!("Touchdown {:?}", outcome);

    runner.recorder().log_summary();
    Ok(())
}

fn run_hover(config: &GuidanceConfig) -> GuidanceResult<()> {
    info!("--- Hover ---");
    let mut vessel = SimulatedVessel::landed(9.81, vec![SimStage::new(1_000.0, 2_000.0, 45_000.0, 250.0)])
        .with_sensor_noise(7, 0.02);

    let mut hover = HoverController::new(&mut vessel, config.hover.clone())?;
    let mut runner = ProgramRunner::new(400);
    runner.run(&mut hover, &mut vessel, |v| v.advance(TIME_STEP))?;

    info!("Operator abort at {:.1} m", vessel.kinematics().get_altitude());
    vessel.set_abort(true)?;
    let mut runner = ProgramRunner::new(MAX_TICKS);
    let outcome = runner.run(&mut hover, &mut vessel, |v| v.advance(TIME_STEP))?;

    info!("Hover {:?}, mode {:?}", outcome, hover.mode());
    runner.recorder().log_summary();
    Ok(())
}
