use gnsslink::geo::{near_point, near_point_with, Enu, NearPointOptions, Selection};
use tracing::debug;

use crate::cmd::NearArgs;
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_near, OutputFormat};

pub fn run(args: NearArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.radius.is_finite() || args.radius < 0.0 {
        return Err(CliError::usage(format!("invalid radius: {}", args.radius)));
    }

    let options = NearPointOptions {
        tolerance: args.tolerance,
        selection: args
            .heading
            .map_or(Selection::TowardEnd, Selection::AlongHeading),
    };
    let result = if args.enu {
        near_point_with(&Enu::new(args.robot), args.start, args.end, args.radius, &options)
    } else {
        near_point(args.start, args.end, args.robot, args.radius, &options)
    };
    debug!(case = ?result.case, d_perp = result.perpendicular_distance, "near point computed");

    print_near(&result, format);
    Ok(SUCCESS)
}
