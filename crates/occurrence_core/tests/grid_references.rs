use occurrence_core::model::record::SrefInput;
use occurrence_core::sref::{SRID_COMBINED, SRID_GB, SRID_IRELAND, SUPPORTED_ACCURACIES};
use occurrence_core::{
    Country, GridSystem, HelmertProjector, SpatialReference, SrefError, SrefSystem,
};

fn sample_point(system: GridSystem) -> (f64, f64) {
    match system {
        GridSystem::Gb => (543_219.0, 267_891.0),
        GridSystem::Ireland => (315_904.0, 234_671.0),
        GridSystem::ChannelIslands => (552_345.0, 5_456_789.0),
    }
}

#[test]
fn encoded_references_decode_to_their_south_west_corner() {
    for system in GridSystem::ALL {
        let codec = system.codec();
        let (easting, northing) = sample_point(system);
        for accuracy in SUPPORTED_ACCURACIES {
            let gridref = codec.encode(easting, northing, accuracy).unwrap();
            assert_eq!(codec.decode(&gridref).unwrap(), gridref);

            let corner = codec.to_coordinate(&gridref).unwrap();
            let size = f64::from(accuracy);
            assert_eq!(corner.accuracy, accuracy, "{gridref}");
            assert_eq!(corner.easting, (easting / size).floor() * size, "{gridref}");
            assert_eq!(corner.northing, (northing / size).floor() * size, "{gridref}");
        }
    }
}

#[test]
fn british_references_at_each_accuracy() {
    let codec = GridSystem::Gb.codec();
    let expected = [
        (100_000, "TL"),
        (10_000, "TL46"),
        (2_000, "TL46I"),
        (1_000, "TL4367"),
        (100, "TL432678"),
        (10, "TL43216789"),
        (1, "TL4321967891"),
    ];
    for (accuracy, gridref) in expected {
        assert_eq!(codec.encode(543_219.0, 267_891.0, accuracy).unwrap(), gridref);
    }
}

#[test]
fn whitespace_and_case_are_normalized() {
    let gb = SrefSystem::Grid(GridSystem::Gb);
    let spaced = SpatialReference::from_gridref(gb, "tl 12 34").unwrap();
    let plain = SpatialReference::from_gridref(gb, "TL1234").unwrap();

    assert_eq!(spaced.gridref(), plain.gridref());
    assert_eq!(spaced.gridref(), "TL1234");
    assert_eq!(spaced.accuracy(), 1_000);
}

#[test]
fn hundred_metre_reference_derives_its_squares() {
    let sref =
        SpatialReference::from_gridref(SrefSystem::Grid(GridSystem::Gb), "TL 123 456").unwrap();

    assert_eq!(sref.gridref(), "TL123456");
    assert_eq!(sref.accuracy(), 100);
    assert_eq!(sref.km100(), "TL");
    assert_eq!(sref.km10(), Some("14"));
    assert_eq!(sref.country(), Country::Gb);
}

#[test]
fn bare_square_has_no_ten_km_square() {
    let sref =
        SpatialReference::from_gridref(SrefSystem::Grid(GridSystem::Ireland), "H").unwrap();

    assert_eq!(sref.km100(), "H");
    assert_eq!(sref.km10(), None);
    assert_eq!(sref.accuracy(), 100_000);
}

#[test]
fn malformed_and_foreign_references_are_rejected() {
    let gb = SrefSystem::Grid(GridSystem::Gb);
    assert!(matches!(
        SpatialReference::from_gridref(gb, "TL123"),
        Err(SrefError::Malformed(_))
    ));
    assert!(matches!(
        SpatialReference::from_gridref(gb, "TL12O"),
        Err(SrefError::Malformed(_))
    ));
    assert!(matches!(
        SpatialReference::from_gridref(gb, "AA1234"),
        Err(SrefError::InvalidSquare { .. })
    ));
    let channel = SrefSystem::Grid(GridSystem::ChannelIslands);
    assert!(SpatialReference::from_gridref(channel, "WB12").is_err());
}

#[test]
fn combined_system_routes_by_square_letters() {
    let projector = HelmertProjector;
    let irish =
        SpatialReference::from_input(&SrefInput::gridref(SRID_COMBINED, "O1234"), &projector)
            .unwrap();
    assert_eq!(irish.system(), GridSystem::Ireland);
    assert_eq!(irish.country(), Country::Ireland);

    let jersey =
        SpatialReference::from_input(&SrefInput::gridref(SRID_COMBINED, "WV6050"), &projector)
            .unwrap();
    assert_eq!(jersey.system(), GridSystem::ChannelIslands);
}

#[test]
fn planar_inputs_need_an_accuracy_and_one_form() {
    let projector = HelmertProjector;
    let sref = SpatialReference::from_input(
        &SrefInput::easting_northing(SRID_IRELAND, 315_904.0, 234_671.0, 1_000),
        &projector,
    )
    .unwrap();
    assert_eq!(sref.gridref(), "O1534");

    let mut missing = SrefInput::easting_northing(SRID_GB, 543_219.0, 267_891.0, 10);
    missing.accuracy = None;
    assert_eq!(
        SpatialReference::from_input(&missing, &projector).unwrap_err(),
        SrefError::MissingAccuracy
    );

    let mut conflicting = SrefInput::gridref(SRID_GB, "TL1234");
    conflicting.easting = Some(1.0);
    conflicting.northing = Some(1.0);
    assert_eq!(
        SpatialReference::from_input(&conflicting, &projector).unwrap_err(),
        SrefError::ConflictingReference
    );
}

#[test]
fn latitude_longitude_lands_on_the_local_grid() {
    let projector = HelmertProjector;
    let cambridge =
        SpatialReference::from_input(&SrefInput::lat_lon(52.2053, 0.1218, 1_000), &projector)
            .unwrap();
    assert_eq!(cambridge.system(), GridSystem::Gb);
    assert_eq!(cambridge.km100(), "TL");
    assert_eq!(cambridge.latitude(), Some(52.2053));

    let spain = SpatialReference::from_input(&SrefInput::lat_lon(40.0, 3.0, 1_000), &projector);
    assert!(matches!(spain, Err(SrefError::OutsideCoverage { .. })));
}
