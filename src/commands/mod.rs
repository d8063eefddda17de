pub type CmdResult<T> = unpin::Result<(T, i32)>;

pub mod normalize;

pub(crate) fn run_json(args: normalize::NormalizeArgs) -> (unpin::Result<serde_json::Value>, i32) {
    crate::tty::status("unpin is working...");

    unpin::output::map_cmd_result_to_json(normalize::run_json(args))
}
