#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! The published parameter sets.
//!
//! The standard set uses a 4096-bit prime modulus with the 256-bit subgroup
//! order `q = 2^256 - 189`. The test set uses small primes so that unit
//! tests can run the full protocol in reasonable time; it provides no
//! security whatsoever.

use lazy_static::lazy_static;
use num_bigint::BigUint;

use util::{
    algebra::{Group, ScalarField},
    pow_radix::PowRadixOption,
};

use crate::fixed_parameters::FixedParameters;

const STANDARD_LARGE_PRIME_DECIMAL: &str = concat!(
    "1044388881413152506691752710716624382579964249047383780384233483283953907971",
    "5536435377299931268758839021736340177774163605029260829463779429557044985420",
    "9761484182524677358068939838632043974791116089773155107490396724388342713291",
    "8813748016269754522343505285898816777211761912392772914485521155521641049273",
    "4462075789619398406194661458068592750534765609732951587038233957102103293147",
    "0971523925173655238408084583604877866731893141833842244389102591188472343308",
    "4701207771901944593286624979917391350564662632723703007964229849154756196890",
    "6152522865330896431849027069260817441492895174182491536341783420753818741316",
    "4601344479689458210687053153580366625457960263245310374145256979390555190154",
    "1856173251385047414840392753585581909950158046256810542678368121278509960520",
    "9576247379429146003106466097926650128583973814357559028513120712481025994423",
    "0895132703925081889249376742332966378370919071616202352966921730093978317141",
    "5808233146823000766917789286154006042281423733706462905243774854543127239500",
    "2458735820126636664305838627781673695476030163442427295922445446082794059997",
    "5939109976916558972258421601746846457621731855794846176577070091322046055759",
    "8574717173408252913596242281190298966500668625620138188265530628036538314433",
    "100326660047110143",
);

const STANDARD_SMALL_PRIME_DECIMAL: &str = concat!(
    "1157920892373161954235709850086879078532699846656405640394575840079131296397",
    "47",
);

const STANDARD_GENERATOR_DECIMAL: &str = concat!(
    "1193597561986412318581396514284395855611059149026869850782527966804746378567",
    "5283397888442259451617066531242339383011860840806359450808781327776983508474",
    "6883589963798527237870817233369094387978405585759195339509768803496494994109",
    "6937432791575841390794711788507512662331507277710947967096196463502222424379",
    "7047390063624258467341322413713913934625491217262865102869442778952368307026",
    "4102332413084663100402635889283790741342401259356660761075766365672754329863",
    "2416927608625401510238001632691735503206232493986302475319248559978631097769",
    "5521440304472749796835402227782813663405901170809977924130294107170105105037",
    "8539485717425482151777277387633806111112178267035315726401285294598397677116",
    "3898936427254988311279779152003591518337673580913652922303632484101249168258",
    "1451485270377045702410273869437550204938880497903562823220995954919936698647",
    "1874840784466132903083308458356458177839111623113116525230200791649979270165",
    "3187297635504862002246955567890813315962127619368636344672363014500393997769",
    "6366175568486301239678814947925601615781412932919249079830924891453538965059",
    "4573156725696657302152874510063002532052622638033113978672254680147128450265",
    "9835031938655769324192820030120935263026312214914182115287810744745159245974",
    "72841036553107847",
);

/// Test-only large prime `p`.
const TEST_LARGE_PRIME: u64 = 18446744073704586917;
/// Test-only subgroup order `q`.
const TEST_SMALL_PRIME: u64 = 65521;
/// Test-only generator `g` of the order-`q` subgroup.
const TEST_GENERATOR: u64 = 15463152587872997502;

fn parse_decimal(s: &str) -> BigUint {
    // The inputs are compile-time constants consisting only of ASCII digits.
    #[allow(clippy::unwrap_used)]
    BigUint::parse_bytes(s.as_bytes(), 10).unwrap()
}

fn make_fixed_parameters(p: BigUint, q: BigUint, g: BigUint, option: PowRadixOption) -> FixedParameters {
    let cofactor = (&p - 1_u8) / &q;
    FixedParameters {
        field: ScalarField::new_unchecked(q.clone()),
        group: Group::new_unchecked(p, q, g).accelerate(option),
        cofactor,
    }
}

lazy_static! {
    /// The parsed standard constants `(p, q, g)`, decoded once per process.
    static ref STANDARD_CONSTANTS: (BigUint, BigUint, BigUint) = (
        parse_decimal(STANDARD_LARGE_PRIME_DECIMAL),
        parse_decimal(STANDARD_SMALL_PRIME_DECIMAL),
        parse_decimal(STANDARD_GENERATOR_DECIMAL),
    );
}

/// The standard parameter set: 4096-bit `p`, `q = 2^256 - 189`.
///
/// Building an acceleration table for the standard group takes noticeable
/// time and memory; see [`PowRadixOption`] for the trade-off.
pub fn standard_parameters(option: PowRadixOption) -> FixedParameters {
    let (p, q, g) = STANDARD_CONSTANTS.clone();
    make_fixed_parameters(p, q, g, option)
}

/// The test-only parameter set, small enough to exercise the whole protocol
/// in unit tests. Never use outside of tests.
pub fn test_parameters(option: PowRadixOption) -> FixedParameters {
    make_fixed_parameters(
        BigUint::from(TEST_LARGE_PRIME),
        BigUint::from(TEST_SMALL_PRIME),
        BigUint::from(TEST_GENERATOR),
        option,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use num_bigint::BigUint;
    use num_traits::One;

    #[test]
    fn standard_q_is_2_to_256_minus_189() {
        let q = parse_decimal(STANDARD_SMALL_PRIME_DECIMAL);
        assert_eq!(q, (BigUint::one() << 256u32) - BigUint::from(189_u8));
    }

    #[test]
    fn standard_cofactor_divides_evenly() {
        let fixed_parameters = standard_parameters(PowRadixOption::NoAcceleration);
        let p_minus_1 = fixed_parameters.group.modulus() - BigUint::one();
        assert_eq!(
            &p_minus_1 / fixed_parameters.field.order(),
            fixed_parameters.cofactor
        );
        assert!((p_minus_1 % fixed_parameters.field.order()).bits() == 0);
    }

    #[test]
    fn test_generator_has_order_q() {
        let fixed_parameters = test_parameters(PowRadixOption::NoAcceleration);
        let g = fixed_parameters.group.generator();
        assert!(g.is_valid(&fixed_parameters.group));
    }
}
