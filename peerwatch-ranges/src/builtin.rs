//! Built-in scan blocks and institution table.
//!
//! 163.247.0.0/16 is the State Connectivity Network; the /24 breakdown below follows
//! the published subnet list at http://red.gob.cl/subredes.html. Subnets without a
//! known owner are left out of the table and attribute to the default institution.

use crate::cidr::Cidr;
use crate::loader::RangeLoadError;
use crate::table::RangeTable;

const SCAN_BLOCKS: &[&str] = &[
    "163.247.0.0/16",
    "160.238.212.0/24",
    "160.238.214.0/24",
    "160.238.215.0/24",
    "200.10.182.0/24",
    "45.229.137.0/24",
    "45.230.22.0/24",
    "45.230.23.0/24",
    "200.10.251.0/24",
    "200.10.252.0/24",
    "200.10.253.0/24",
    "200.12.140.0/24",
    "200.12.141.0/24",
    "167.28.193.0/24",
    "170.233.152.0/24",
    "170.233.153.0/24",
];

const INSTITUTIONS: &[(&str, &str)] = &[
    ("163.247.40.0/24", "@MinagriCL"),
    ("163.247.41.0/24", "@MinisterioBBNN"),
    ("163.247.42.0/24", "@MinDefChile"),
    ("163.247.43.0/24", "@MEconomia"),
    ("163.247.44.0/24", "@Mineduc"),
    ("163.247.45.0/24", "@Min_Hacienda"),
    ("163.247.46.0/24", "@MinJuDDHH"),
    ("163.247.47.0/24", "@MinMineria_cl"),
    ("163.247.48.0/24", "@MOP_Chile"),
    ("163.247.49.0/24", "@MinDesarrollo"),
    ("163.247.50.0/24", "@MinRel_Chile"),
    ("163.247.51.0/24", "@MinisterioSalud"),
    ("163.247.52.0/24", "@MTTChile"),
    ("163.247.53.0/24", "@Minvu"),
    ("163.247.55.0/24", "@MinTrabChile"),
    ("163.247.56.0/24", "@VoceriaGobierno"),
    ("163.247.57.0/24", "@SegPres"),
    ("163.247.58.0/24", "@MinMujeryEG"),
    ("163.247.59.0/24", "@MinEnergia"),
    ("163.247.60.0/24", "@ContraloriaCL"),
    ("163.247.61.0/24", "@Fonasa"),
    ("163.247.62.0/24", "@IPSChile"),
    ("163.247.63.0/24", "@SII_Chile"),
    ("163.247.64.0/24", "@RegCivil_Chile"),
    ("163.247.65.0/24", "@TGRChile"),
    ("163.247.70.0/24", "@Min_Interior"),
    ("163.247.71.0/24", "@Presidencia_cl"),
    ("163.247.78.0/24", "@MMAChile"),
    ("163.247.79.0/24", "@SuperPensiones"),
    ("163.247.80.0/24", "Red de Salud @BdoMartorell @MinisterioSalud"),
    ("160.238.212.0/24", "@bcentralchile"),
    ("160.238.214.0/24", "@bcentralchile"),
    ("160.238.215.0/24", "@bcentralchile"),
    ("200.10.182.0/24", "@bcentralchile"),
    ("45.229.137.0/24", "@TVN"),
    ("45.230.22.0/24", "@TVN"),
    ("45.230.23.0/24", "@TVN"),
    ("200.10.251.0/24", "@SII_Chile"),
    ("200.10.252.0/24", "@SII_Chile"),
    ("200.10.253.0/24", "@SII_Chile"),
    ("200.12.140.0/24", "@Enap_Informa"),
    ("200.12.141.0/24", "@Enap_Informa"),
    ("167.28.193.0/24", "@BancoEstado"),
    ("170.233.152.0/24", "@BancoEstado"),
    ("170.233.153.0/24", "@BancoEstado"),
];

/// The built-in scan blocks, in declared order.
pub fn default_blocks() -> Result<Vec<Cidr>, RangeLoadError> {
    SCAN_BLOCKS
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.parse::<Cidr>()
                .map_err(|source| RangeLoadError::Parse { line: i + 1, source })
        })
        .collect()
}

/// The built-in institution table, in declared order.
pub fn default_table() -> Result<RangeTable, RangeLoadError> {
    let mut table = RangeTable::empty();
    for (i, (cidr, label)) in INSTITUTIONS.iter().enumerate() {
        let cidr = cidr
            .parse::<Cidr>()
            .map_err(|source| RangeLoadError::Parse { line: i + 1, source })?;
        table.push(cidr, Some((*label).to_string()));
    }
    Ok(table)
}
