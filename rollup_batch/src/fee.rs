//! Fee selector table.
//!
//! A selector picks the share of the transferred amount charged as a fee.
//! Consecutive selectors differ by a factor of `10^(1/55)`, so every 55
//! selectors make a decade: 255 charges 100%, 200 charges 10%, 145 charges
//! 1% and 90 charges 0.1%. Selector 0 is free.

use ethereum_types::U256;

use crate::float16::{Float16, Float16Error};

pub type FeeSelector = u8;

/// Fractional bits of the entries of [`FEE_FACTOR_SHIFTED`].
pub const FEE_FACTOR_SHIFT: usize = 60;

/// `floor(10^((i - 255) / 55) * 2^60)` for every selector `i > 0`.
pub const FEE_FACTOR_SHIFTED: [u64; 256] = [
    0x0000000000000000, 0x00001942553a194a, 0x00001a56cb36416f, 0x00001b77130f5ce8,
    0x00001ca3ae237a90, 0x00001ddd23589640, 0x00001f23ff59221f, 0x00002078d4d3267f,
    0x000021dc3cba14a2, 0x0000234ed68b69ee, 0x000024d148964260, 0x000026644045fa56,
    0x0000280872700135, 0x000029be9ba4ffd3, 0x00002b8780857710, 0x00002d63ee19fc9d,
    0x00002f54ba2f3d7b, 0x0000315ac3b5ef93, 0x00003376f326dd5b, 0x000035aa3aeb3886,
    0x000037f597c9627d, 0x00003a5a11565b7e, 0x00003cd8ba6c0b3f, 0x00003f72b1a49832,
    0x0000422921db04c4, 0x000044fd42b14c3f, 0x000047f0591c3b97, 0x00004b03b7f544cc,
    0x00004e38c0928e61, 0x00005190e3658320, 0x0000550da0a02950, 0x000058b088e18b95,
    0x00005c7b3de980d2, 0x0000606f735423c5, 0x0000648eef5d4e6e, 0x000068db8bac710c,
    0x00006d5736292018, 0x00007203f1d8b8b0, 0x000076e3d7c57edc, 0x00007bf917ef9d6f,
    0x00008145fa48739f, 0x000086ccdfb8a125, 0x00008c9043314676, 0x00009292bac8f3b8,
    0x000098d6f8e4c64e, 0x00009f5fcd6e3a4f, 0x0000a63027163afd, 0x0000ad4b14a6031c,
    0x0000b4b3c65e6473, 0x0000bc6d8f661405, 0x0000c47be7479f6f, 0x0000cce26b7fb6cd,
    0x0000d5a4e11c7ddf, 0x0000dec7366e9edf, 0x0000e84d84cce144, 0x0000f23c126b0f34,
    0x0000fc975444fce7, 0x00010763f01e8e5a, 0x000112a6be99a117, 0x00011e64cd62c9a4,
    0x00012aa36175de87, 0x00013767f97b553d, 0x000144b8503f80fb, 0x0001529a5f44ce55,
    0x000161146172234e, 0x0001702cd5de97c3, 0x00017fea82bbc760, 0x0001905478600c16,
    0x0001a1721471fe40, 0x0001b34b0536a6a8, 0x0001c5e74d03de26, 0x0001d94f45d866d5,
    0x0001ed8ba51b5bbf, 0x000202a57f84a58f, 0x000218a64d30353e, 0x00022f97edddd8ea,
    0x00024784ad5f92f2, 0x0002607748387078, 0x00027a7af06df1fc, 0x0002959b528e2fad,
    0x0002b1e49aecfa7d, 0x0002cf637b1a53ed, 0x0002ee252f94affc, 0x00030e3785b98fd0,
    0x00032fa8e1f71f46, 0x0003528846419d27, 0x000376e558cf73d5, 0x00039cd06b1f083a,
    0x0003c45a814965b7, 0x0003ed9559a51054, 0x0004189374bc6a7e, 0x000445681d9b40f6,
    0x00047427727736e4, 0x0004a4e66db6f49e, 0x0004d7baef5c2659, 0x00050cbbc6d48438,
    0x00054400bd364b74, 0x00057da29fecc0a2, 0x0005b9bb4bd98537, 0x0005f865b8efbf0d,
    0x000639be064e471e, 0x00067de186de4de8, 0x0006c4eece7c1f1e, 0x00070f05bfafec82,
    0x00075c4799fcc837, 0x0007acd708cc3a5e, 0x000800d832fd2403, 0x00085870cb1ceabe,
    0x0008b3c8205234bb, 0x000913073000ccaa, 0x00097658b82e9808, 0x0009dde94ab1e109,
    0x000a49e761318f8c, 0x000aba8372004ae6, 0x000b2ff005dbe071, 0x000baa61ce9ab148,
    0x000c2a0fbed15469, 0x000caf33227b09d0, 0x000d3a07b8b00f53, 0x000dcacbce756112,
    0x000e61c05ab1eda1, 0x000eff291b55c9c4, 0x000fa34cb3c078e2, 0x00104e74cc73ee86,
    0x001100ee34228292, 0x0011bb090226ad7e, 0x00127d18ba740457, 0x001347747311957d,
    0x00141a76fb2e7798, 0x0014f67f03e21470, 0x0015dbef4aaa7926, 0x0016cb2ec5bbbd7d,
    0x0017c4a8d23464b6, 0x0018c8cd644b73df, 0x0019d811398ddcc2, 0x001af2ee0d41c8eb,
    0x001c19e2cf074742, 0x001d4d73dbcedfdf, 0x001e8e2b393f9e20, 0x001fdc98d3a738c1,
    0x00213952be90238e, 0x0022a4f5781a865b, 0x002420242f36524d, 0x0025ab890cddf927,
    0x002747d58072a34f, 0x0028f5c28f5c28f5, 0x002ab611281089a5, 0x002c898a78a824e9,
    0x002e710049258e2c, 0x00306d4d59997f81, 0x00327f55c44d2a33, 0x0034a807641ef28f,
    0x0036e85a3f3f8658, 0x00394150f67f342f, 0x003bb3f9395d7683, 0x003e416c3f0ec731,
    0x0040eacf44af0b10, 0x0043b15410d9372c, 0x004696397cdf3d15, 0x00499acc03dfd22c,
    0x004cc06657fa47af, 0x00500871fde36822, 0x00537467ef212b6d, 0x005705d143360f55,
    0x005abe47e007fea6, 0x005e9f7731d1f056, 0x0062ab1ceaf2ca61, 0x0066e309cbef9b7f,
    0x006b49227402ed02, 0x006fdf603a96c46e, 0x0074a7d2120aecd5, 0x0079a49d742d4c1b,
    0x007ed7ff58ce6222, 0x0084444d36e09945, 0x0089ebf61095cabc, 0x008fd1838af3484f,
    0x0095f79b1159e1ab, 0x009c60ff0584b8da, 0x00a3108ffc875145, 0x00aa094e095919ba,
    0x00b14e5a1582c6ec, 0x00b8e2f748882b6b, 0x00c0ca8c7eafd6e4, 0x00c908a5cfd0abf4,
    0x00d1a0f626d4cc69, 0x00da9758eaa8bb7c, 0x00e3efd3b95566eb, 0x00edae98360bef1c,
    0x00f7d805eaf286ba, 0x010270ac3f8a9f99, 0x010d7d4c8491d934, 0x011902dc1648c899,
    0x012506869614bebe, 0x01318db03c7c2d43, 0x013e9df84488378f, 0x014c3d3b71a16390,
    0x015a7196b1093f96, 0x01694169d81f370b, 0x0178b35a80abbb86, 0x0188ce57047a611f,
    0x0199999999999999, 0x01ab1cab90a5607b, 0x01bd5f68b691711e, 0x01d06a02db778dbe,
    0x01e445057ffefb0a, 0x01f8f959ab03a600, 0x020e9049e935799e, 0x02251386787b3f71,
    0x023c8d29a0f809d6, 0x025507bc3da6a127, 0x026e8e3a7693c7ee, 0x02892c18aed66ea6,
    0x02a4ed48a87c27ba, 0x02c1de3ee0b862d3, 0x02e00bf826be35b9, 0x02ff83ff6fc6ccdf,
    0x03205473eae21158, 0x03428c0f574bb243, 0x03663a2ca01c9959, 0x038b6ecec04ff285,
    0x03b23aa7f2336365, 0x03daaf212d7be7ce, 0x0404de61f75c12fd, 0x0430db58881d421c,
    0x045eb9c249e3ac51, 0x048e8e34b46d4054, 0x04c06e2689c4f914, 0x04f46ff9780fd559,
    0x052aab0424c5fcb6, 0x0563379ca5d9eb5d, 0x059e2f236d80d31a, 0x05dbac0ead82d0ae,
    0x061bc9f6372f3886, 0x065ea59fdd492cb7, 0x06a45d0c5d7b0146, 0x06ed0f84d71bc53f,
    0x0738dda8d551b22e, 0x0787e97cf2de64eb, 0x07da567a1e26b789, 0x0830499d844ffc21,
    0x0889e9792a9752dd, 0x08e75e453d56052e, 0x0948d1f21c77571e, 0x09ae703b2d79434c,
    0x0a1866ba7b6a3bff, 0x0a86e4fd2db27c0a, 0x0afa1c98ded7d601, 0x0b724141dccf7374,
    0x0bef88e25cd9c4a6, 0x0c722bb2ad522b9e, 0x0cfa6452704de3a0, 0x0d886fe2ea5c7be0,
    0x0e1c8e2271382675, 0x0eb7018906b55343, 0x0f580f662cc7cb3e, 0x1000000000000000,
];

/// Fee factor of `selector`, scaled by `2^FEE_FACTOR_SHIFT`.
pub fn fee_factor(selector: FeeSelector) -> U256 {
    FEE_FACTOR_SHIFTED[usize::from(selector)].into()
}

/// Fee actually deducted for moving `amount` with `selector`: the amount
/// times the shifted factor, shifted back down, then floored to a Float16
/// value. Whatever either step drops is never charged nor refunded.
pub fn compute_fee(amount: U256, selector: FeeSelector) -> Result<U256, Float16Error> {
    let raw = (amount * fee_factor(selector)) >> FEE_FACTOR_SHIFT;
    Float16::floor_fix(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    #[test]
    fn selector_zero_is_free() {
        assert_eq!(compute_fee(u(1_000_000), 0), Ok(U256::zero()));
    }

    #[test]
    fn top_selector_charges_the_whole_amount() {
        assert_eq!(FEE_FACTOR_SHIFTED[255], 1 << FEE_FACTOR_SHIFT);
        assert_eq!(compute_fee(u(1000), 255), Ok(u(1000)));
    }

    #[test]
    fn ten_percent_of_fifty_charges_four() {
        // The shifted 10% sits just below 0.1, so 5 truncates to 4.
        assert_eq!(compute_fee(u(50), 200), Ok(u(4)));
        assert_eq!(compute_fee(u(500), 200), Ok(u(49)));
    }

    #[test]
    fn one_decade_is_fifty_five_selectors() {
        assert_eq!(compute_fee(u(100_000), 145), Ok(u(999)));
        assert_eq!(compute_fee(u(1_000_000), 90), Ok(u(999)));
    }

    #[test]
    fn fee_is_floored_to_float16() {
        // 99_999 is not a Float16 value; 99_950 is the one below it.
        assert_eq!(compute_fee(u(1_000_000), 200), Ok(u(99_950)));
    }

    #[test]
    fn tiny_fees_truncate_to_zero() {
        assert_eq!(compute_fee(u(50), 1), Ok(U256::zero()));
    }

    #[test]
    fn factors_increase_with_selector() {
        assert!(FEE_FACTOR_SHIFTED.windows(2).all(|w| w[0] < w[1]));
    }
}
