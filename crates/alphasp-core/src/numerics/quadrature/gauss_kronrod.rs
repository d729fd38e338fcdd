//! Gauss–Kronrod rule pairs with QUADPACK error scaling.
//!
//! Abscissae and weights are the published QUADPACK `qk21` / `qk31` tables.
//! Only the non-negative half of each symmetric rule is stored; the last
//! entry of `kronrod_nodes` is the centre.

use super::Integrand;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussKronrodRule {
    kronrod_nodes: &'static [f64],
    kronrod_weights: &'static [f64],
    gauss_weights: &'static [f64],
}

/// 10-point Gauss rule embedded in a 21-point Kronrod extension.
pub const GAUSS_KRONROD_21: GaussKronrodRule = GaussKronrodRule {
    kronrod_nodes: &XGK21,
    kronrod_weights: &WGK21,
    gauss_weights: &WG10,
};

/// 15-point Gauss rule embedded in a 31-point Kronrod extension.
pub const GAUSS_KRONROD_31: GaussKronrodRule = GaussKronrodRule {
    kronrod_nodes: &XGK31,
    kronrod_weights: &WGK31,
    gauss_weights: &WG15,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleEstimate {
    pub value: f64,
    pub abs_error: f64,
    /// Integral of `|f|`.
    pub abs_integral: f64,
    /// Integral of `|f - mean(f)|`.
    pub asc_integral: f64,
}

impl GaussKronrodRule {
    pub fn point_count(&self) -> usize {
        2 * self.kronrod_nodes.len() - 1
    }

    pub fn apply<I>(&self, integrand: &mut I, lower: f64, upper: f64) -> RuleEstimate
    where
        I: Integrand + ?Sized,
    {
        let nodes = self.kronrod_nodes;
        let n = nodes.len();
        let center = 0.5 * (lower + upper);
        let half_length = 0.5 * (upper - lower);
        let abs_half_length = half_length.abs();

        let mut left = [0.0_f64; MAX_NODES];
        let mut right = [0.0_f64; MAX_NODES];

        let f_center = integrand.evaluate(center);
        let mut result_gauss = if n % 2 == 0 {
            f_center * self.gauss_weights[n / 2 - 1]
        } else {
            0.0
        };
        let mut result_kronrod = f_center * self.kronrod_weights[n - 1];
        let mut result_abs = result_kronrod.abs();

        // Odd indices are shared with the embedded Gauss rule.
        for j in 0..(n - 1) / 2 {
            let jtw = 2 * j + 1;
            let abscissa = half_length * nodes[jtw];
            let f1 = integrand.evaluate(center - abscissa);
            let f2 = integrand.evaluate(center + abscissa);
            left[jtw] = f1;
            right[jtw] = f2;
            result_gauss += self.gauss_weights[j] * (f1 + f2);
            result_kronrod += self.kronrod_weights[jtw] * (f1 + f2);
            result_abs += self.kronrod_weights[jtw] * (f1.abs() + f2.abs());
        }
        for j in 0..n / 2 {
            let jtwm1 = 2 * j;
            let abscissa = half_length * nodes[jtwm1];
            let f1 = integrand.evaluate(center - abscissa);
            let f2 = integrand.evaluate(center + abscissa);
            left[jtwm1] = f1;
            right[jtwm1] = f2;
            result_kronrod += self.kronrod_weights[jtwm1] * (f1 + f2);
            result_abs += self.kronrod_weights[jtwm1] * (f1.abs() + f2.abs());
        }

        let mean = 0.5 * result_kronrod;
        let mut result_asc = self.kronrod_weights[n - 1] * (f_center - mean).abs();
        for j in 0..n - 1 {
            result_asc += self.kronrod_weights[j] * ((left[j] - mean).abs() + (right[j] - mean).abs());
        }

        let raw_error = (result_kronrod - result_gauss) * half_length;
        let value = result_kronrod * half_length;
        let abs_integral = result_abs * abs_half_length;
        let asc_integral = result_asc * abs_half_length;

        RuleEstimate {
            value,
            abs_error: rescale_error(raw_error, abs_integral, asc_integral),
            abs_integral,
            asc_integral,
        }
    }
}

const MAX_NODES: usize = 16;

fn rescale_error(error: f64, abs_integral: f64, asc_integral: f64) -> f64 {
    let mut error = error.abs();
    if asc_integral != 0.0 && error != 0.0 {
        let scale = (200.0 * error / asc_integral).powf(1.5);
        error = if scale < 1.0 {
            asc_integral * scale
        } else {
            asc_integral
        };
    }
    if abs_integral > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        let min_error = 50.0 * f64::EPSILON * abs_integral;
        if min_error > error {
            error = min_error;
        }
    }
    error
}

const XGK21: [f64; 11] = [
    0.995_657_163_025_808_080_735_527_280_689_003,
    0.973_906_528_517_171_720_077_964_012_084_452,
    0.930_157_491_355_708_226_001_207_180_059_508,
    0.865_063_366_688_984_510_732_096_688_423_493,
    0.780_817_726_586_416_897_063_717_578_345_042,
    0.679_409_568_299_024_406_234_327_365_114_874,
    0.562_757_134_668_604_683_339_000_099_272_694,
    0.433_395_394_129_247_190_799_265_943_165_784,
    0.294_392_862_701_460_198_131_126_603_103_866,
    0.148_874_338_981_631_210_884_826_001_129_720,
    0.0,
];

const WG10: [f64; 5] = [
    0.066_671_344_308_688_137_593_568_809_893_332,
    0.149_451_349_150_580_593_145_776_339_657_697,
    0.219_086_362_515_982_043_995_534_934_228_163,
    0.269_266_719_309_996_355_091_226_921_569_469,
    0.295_524_224_714_752_870_173_892_994_651_338,
];

const WGK21: [f64; 11] = [
    0.011_694_638_867_371_874_278_064_396_062_192,
    0.032_558_162_307_964_727_478_818_972_459_390,
    0.054_755_896_574_351_996_031_381_300_244_580,
    0.075_039_674_810_919_952_767_043_140_916_190,
    0.093_125_454_583_697_605_535_065_465_083_366,
    0.109_387_158_802_297_641_899_210_590_325_805,
    0.123_491_976_262_065_851_077_958_109_831_074,
    0.134_709_217_311_473_325_928_054_001_771_707,
    0.142_775_938_577_060_080_797_094_273_138_717,
    0.147_739_104_901_338_491_374_841_515_972_068,
    0.149_445_554_002_916_905_664_936_468_389_821,
];

const XGK31: [f64; 16] = [
    0.998_002_298_693_397_060_285_172_840_152_271,
    0.987_992_518_020_485_428_489_565_718_586_613,
    0.967_739_075_679_139_134_257_347_978_784_337,
    0.937_273_392_400_705_904_307_758_947_710_209,
    0.897_264_532_344_081_900_882_509_656_454_496,
    0.848_206_583_410_427_216_200_648_320_774_217,
    0.790_418_501_442_465_932_967_649_294_817_947,
    0.724_417_731_360_170_047_416_186_054_613_938,
    0.650_996_741_297_416_970_533_735_895_313_275,
    0.570_972_172_608_538_847_537_226_737_253_911,
    0.485_081_863_640_239_680_693_655_740_232_351,
    0.394_151_347_077_563_369_897_207_370_981_045,
    0.299_180_007_153_168_812_166_780_024_266_389,
    0.201_194_093_997_434_522_300_628_303_394_596,
    0.101_142_066_918_717_499_027_074_231_447_392,
    0.0,
];

const WG15: [f64; 8] = [
    0.030_753_241_996_117_268_354_628_393_577_204,
    0.070_366_047_488_108_124_709_267_416_450_667,
    0.107_159_220_467_171_935_011_869_546_685_869,
    0.139_570_677_926_154_314_447_804_794_511_028,
    0.166_269_205_816_993_933_553_200_860_481_209,
    0.186_161_000_015_562_211_026_800_561_866_423,
    0.198_431_485_327_111_576_456_118_326_443_839,
    0.202_578_241_925_561_272_880_620_199_967_519,
];

const WGK31: [f64; 16] = [
    0.005_377_479_872_923_348_987_792_051_430_128,
    0.015_007_947_329_316_122_538_374_763_075_807,
    0.025_460_847_326_715_320_186_874_001_019_653,
    0.035_346_360_791_375_846_222_037_948_478_360,
    0.044_589_751_324_764_876_608_227_299_373_280,
    0.053_481_524_690_928_087_265_343_147_239_430,
    0.062_009_567_800_670_640_285_139_230_960_803,
    0.069_854_121_318_728_258_709_520_077_099_147,
    0.076_849_680_757_720_378_894_432_777_482_659,
    0.083_080_502_823_133_021_038_289_247_286_104,
    0.088_564_443_056_211_770_647_275_443_693_774,
    0.093_126_598_170_825_321_225_486_872_747_346,
    0.096_642_726_983_623_678_505_179_907_627_589,
    0.099_173_598_721_791_959_332_393_173_484_603,
    0.100_769_845_523_875_595_044_946_662_617_570,
    0.101_330_007_014_791_549_017_374_792_767_493,
];
