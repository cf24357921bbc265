//! Small reference networks shared by unit and integration tests.

use gbal_core::{
    Branch, BranchId, Bus, BusId, Country, DanglingLine, DanglingLineId, Gen, GenId, HalfLine,
    HvdcLine, HvdcLineId, Leg, Load, LoadId, Megawatts, Network, Terminal, ThreeWindingsTransformer,
    ThreeWindingsTransformerId, TieLine, TieLineId,
};

fn country(code: &str) -> Country {
    Country::new(code).expect("valid country code")
}

/// Two buses, FR and BE, joined by two identical lines.
///
/// FR produces 3000 MW and consumes 1800 MW; BE produces 1500 MW and
/// consumes 2700 MW. The DC solution exports 1200 MW from FR to BE.
pub fn fr_be_network() -> Network {
    let mut network = Network::new("fr_be");
    let fr = BusId::new(1);
    let be = BusId::new(2);
    network
        .add_bus(Bus::new(fr, "FR1", "VL_FR").in_country(country("FR")))
        .expect("bus FR1");
    network
        .add_bus(Bus::new(be, "BE1", "VL_BE").in_country(country("BE")))
        .expect("bus BE1");

    network
        .add_gen(
            Gen::new(GenId::new(1), "GEN_FR".into(), fr)
                .with_p_limits(0.0, 4000.0)
                .with_target_p(3000.0),
        )
        .expect("gen FR");
    network
        .add_gen(
            Gen::new(GenId::new(2), "GEN_BE".into(), be)
                .with_p_limits(0.0, 4000.0)
                .with_target_p(1500.0),
        )
        .expect("gen BE");
    network
        .add_load(Load::new(LoadId::new(1), "LOAD_FR".into(), fr, 1800.0, 100.0))
        .expect("load FR");
    network
        .add_load(Load::new(LoadId::new(2), "LOAD_BE".into(), be, 2700.0, 150.0))
        .expect("load BE");

    for id in 1..=2 {
        network
            .add_branch(Branch::new(
                BranchId::new(id),
                format!("FR-BE {}", id),
                fr,
                be,
                0.1,
            ))
            .expect("line FR-BE");
    }
    network
}

/// FR (two voltage levels), BE and DE with every kind of border element.
///
/// - FR1-FR2 internal line, FR2-BE line
/// - FR1-DE tie line meeting at X-node `XFR_DE`
/// - BE-DE HVDC link carrying 100 MW
/// - a DE dangling line exporting 100 MW through `XDE_NL`
/// - a three-winding transformer joining FR2, BE and DE
///
/// Injections: FR +800 MW, BE −500 MW, DE −200 MW (including the dangling
/// line), so the AC system is balanced.
pub fn multi_border_network() -> Network {
    let mut network = Network::new("multi_border");
    let fr1 = BusId::new(1);
    let fr2 = BusId::new(2);
    let be = BusId::new(3);
    let de = BusId::new(4);
    network
        .add_bus(Bus::new(fr1, "FR1", "VL_FR1").in_country(country("FR")))
        .expect("bus FR1");
    network
        .add_bus(Bus::new(fr2, "FR2", "VL_FR2").in_country(country("FR")))
        .expect("bus FR2");
    network
        .add_bus(Bus::new(be, "BE1", "VL_BE").in_country(country("BE")))
        .expect("bus BE1");
    network
        .add_bus(Bus::new(de, "DE1", "VL_DE").in_country(country("DE")))
        .expect("bus DE1");

    let gens = [(1, fr1, 1300.0, 3000.0), (2, be, 500.0, 2000.0), (3, de, 800.0, 2000.0)];
    for (id, bus, target, pmax) in gens {
        network
            .add_gen(
                Gen::new(GenId::new(id), format!("GEN{}", id), bus)
                    .with_p_limits(0.0, pmax)
                    .with_target_p(target),
            )
            .expect("generator");
    }
    for (id, bus, p0) in [(1, fr2, 500.0), (2, be, 1000.0), (3, de, 1000.0)] {
        network
            .add_load(Load::new(LoadId::new(id), format!("LOAD{}", id), bus, p0, 0.0))
            .expect("load");
    }

    network
        .add_branch(Branch::new(BranchId::new(1), "FR1-FR2".into(), fr1, fr2, 0.05))
        .expect("line FR1-FR2");
    network
        .add_branch(Branch::new(BranchId::new(2), "FR2-BE".into(), fr2, be, 0.1))
        .expect("line FR2-BE");
    network
        .add_tie_line(TieLine {
            id: TieLineId::new(1),
            name: "FR-DE".into(),
            xnode_code: Some("XFR_DE".into()),
            half1: HalfLine::new(DanglingLineId::new(11), "FR-DE half 1".into(), fr1, 0.05),
            half2: HalfLine::new(DanglingLineId::new(12), "FR-DE half 2".into(), de, 0.05),
        })
        .expect("tie line FR-DE");
    network
        .add_hvdc_line(HvdcLine {
            id: HvdcLineId::new(1),
            name: "BE-DE HVDC".into(),
            side1: Terminal::new(be),
            side2: Terminal::new(de),
            active_power_setpoint: Megawatts(100.0),
        })
        .expect("hvdc BE-DE");
    network
        .add_dangling_line(
            DanglingLine::new(DanglingLineId::new(21), "DE-NL".into(), de, 100.0)
                .with_xnode("XDE_NL"),
        )
        .expect("dangling line DE-NL");
    let leg = |bus| Leg {
        terminal: Terminal::new(bus),
        reactance: 0.1,
    };
    network
        .add_three_windings_transformer(ThreeWindingsTransformer {
            id: ThreeWindingsTransformerId::new(1),
            name: "FR2-BE-DE".into(),
            legs: [leg(fr2), leg(be), leg(de)],
        })
        .expect("three-winding transformer");
    network
}
